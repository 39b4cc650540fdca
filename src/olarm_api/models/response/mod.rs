pub mod devices_response;
