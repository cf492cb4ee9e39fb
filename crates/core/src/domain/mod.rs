pub mod question;
pub mod record;
