pub mod alarm_control_panel;
pub mod availability;
pub mod binary_sensor;
pub mod cover;
pub mod device;
