mod ffmpeg_backend;
mod ffmpeg_command;
mod ffprobe_info;
mod file_hasher;
mod file_tools;
mod media;
mod path_validator;
mod video_scanner;
mod volumes;

pub use ffmpeg_backend::{FfmpegBackend, FfmpegDecoder, FfmpegEncoder};
pub use ffmpeg_command::{DecodeCommand, EncodeCommand, PIXEL_FORMAT};
pub use ffprobe_info::{ffprobe_args, parse_ffprobe_output, probe_media_info};
pub use file_hasher::same_content;
pub use file_tools::{
    Claim, Reservation, claim_destination, copy_staged, move_file, numbered_path, staging_path,
    write_staged,
};
pub use media::{
    CHANNELS, EncodeSettings, Frame, FrameSink, FrameSource, MediaBackend, MediaInfo,
};
pub use path_validator::{ensure_directory_exists, resolve_path, validate_directory_exists};
pub use video_scanner::{ScanExclusion, ScanResult, VideoAsset, VolumeScanner, probe_asset};
pub use volumes::removable_mount_points;
