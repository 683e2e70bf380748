pub mod audio_probe;
