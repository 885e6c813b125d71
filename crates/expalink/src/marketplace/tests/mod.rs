mod common;
mod unlock;
