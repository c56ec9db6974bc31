pub mod chatmodel;
pub mod jobmodel;
pub mod trustmodel;
pub mod usermodel;
