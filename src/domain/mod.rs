pub mod convention;
pub mod hijri;
pub mod models;
pub mod qibla;
