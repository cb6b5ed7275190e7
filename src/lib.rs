#[allow(non_snake_case)]
pub mod Annotator;
#[allow(non_snake_case)]
pub mod Matcher;
pub mod cli;
pub mod symbolic;
