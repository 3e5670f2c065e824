pub mod description;
pub mod soap;
pub mod ssdp;
