// Library root: check-in kiosk core. Holds the dataset snapshot, keeps it in
// sync with the server of record, and implements the name entry and
// registration flow independently of any front end.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod entry;
pub mod protocol;
pub mod registration;
pub mod store;
pub mod sync;

#[cfg(test)]
mod fake;
