mod detached_launch;
mod hook_handler;
