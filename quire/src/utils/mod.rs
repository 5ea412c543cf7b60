pub mod postprocess;
