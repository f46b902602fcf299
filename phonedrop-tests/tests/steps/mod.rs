mod reconnect_steps;
mod relay_steps;
mod session_validation_steps;
mod transfer_steps;
