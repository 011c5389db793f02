pub mod blend;
pub mod box_filter;
pub mod color_space;
pub mod color_transfer;
pub mod gaussian_filter;
pub mod instance;
pub mod occupancy;
pub mod placement;
pub mod run;
pub mod scene;
pub mod seamless_clone;
pub mod summed_area_table;
pub mod synthesis;
