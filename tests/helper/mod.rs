#![allow(dead_code)]

mod strategy;

pub use strategy::{Calls, FakeStrategy};
