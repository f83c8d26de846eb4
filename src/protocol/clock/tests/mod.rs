mod estimator;
mod timestamp;
