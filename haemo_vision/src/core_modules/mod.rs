pub mod area_estimator;
pub mod calibration;
pub mod pixel;
pub mod region_detector;
pub mod region_mask;
pub mod segmentation;
pub mod timestamp;
pub mod volume;
