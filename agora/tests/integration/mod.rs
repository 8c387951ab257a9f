mod end_to_end;
mod handshake;
mod merge_and_errors;
mod scheduler;
mod settlement;
mod shutdown;
