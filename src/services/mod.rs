pub mod conversion_service;
pub mod export_service;
pub mod ofx_service;
