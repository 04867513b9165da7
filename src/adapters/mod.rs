pub mod libav;
