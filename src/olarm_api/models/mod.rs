pub mod request;
pub mod response;

pub mod area;
pub mod device;
pub mod device_profile;
pub mod device_state;
