pub mod create;
pub mod delete;
pub mod deployment;
pub mod get;
pub mod list;
pub mod logs;
pub mod propose;
pub mod regions;
pub mod spec;
pub mod tier;
pub mod update;
