//! SMTP front end for postgate.

mod smtp;

pub use smtp::SmtpServer;
