pub mod actions_request;
