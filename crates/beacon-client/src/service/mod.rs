pub mod head_event;
