mod config;
mod task;
