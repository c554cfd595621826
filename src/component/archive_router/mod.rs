//! 封存路由元件
//!
//! 以拍攝日期決定封存資料夾，負責搬移、複製與縮時輸出的最終放置

mod destination;
mod main;

pub use destination::{ArchiveDestination, beside_source_path, date_folder_name};
pub use main::{ArchiveRouter, Placement, place_encoded};
