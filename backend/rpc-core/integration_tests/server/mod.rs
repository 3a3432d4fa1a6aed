mod helpers;
mod lifecycle;
mod rpc;
