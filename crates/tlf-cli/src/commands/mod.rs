pub mod check;
pub mod dispatch;
pub mod inspect;
pub mod list;
pub mod run;
pub mod schema;
