pub mod aggregates;
pub mod geocoder;
pub mod mailer;

pub use geocoder::{GeoLocation, GeocodeError, Geocoder, MapQuestGeocoder, StaticGeocoder};
pub use mailer::{Email, HttpMailer, LogMailer, MailError, Mailer, MemoryMailer};
