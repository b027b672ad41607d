pub mod booking;
pub mod movie;
pub mod payment;
pub mod promo;
pub mod seat;

pub use booking::{BookingSummary, PaymentReceipt};
pub use movie::{Movie, MoviePage};
pub use payment::PaymentMethod;
pub use promo::{PromoCatalog, PromoCode, PromoKind};
pub use seat::{SeatId, SeatLayout};
