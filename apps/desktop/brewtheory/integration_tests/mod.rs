mod binary;
mod service;
