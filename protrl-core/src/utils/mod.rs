pub mod rollout_buffer;
