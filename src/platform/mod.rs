pub mod camera;
pub mod display;
pub mod signals;

pub use camera::{Camera, CameraError, CameraHandle, DeviceCamera, MediaStream};
pub use display::{Fullscreen, FullscreenError, TerminalFullscreen};
pub use signals::{ClipboardAction, KeyChord, PlatformSignal};
