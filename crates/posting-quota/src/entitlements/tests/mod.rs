mod common;
mod service;
mod validator;
