mod behavior;
mod births;
mod culling;
mod environment;
mod perception;
