pub mod redirect;
pub mod shorturls;
