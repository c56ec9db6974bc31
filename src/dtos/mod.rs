pub mod aidtos;
pub mod chatdtos;
pub mod jobdtos;
pub mod trustdtos;
pub mod userdtos;
