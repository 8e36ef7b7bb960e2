mod pipeline;
mod ranking;
