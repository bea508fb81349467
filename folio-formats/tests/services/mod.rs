//! Editor and IO service tests

mod editor;
mod io;
