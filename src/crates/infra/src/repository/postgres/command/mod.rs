pub mod db_data;
pub mod user;
