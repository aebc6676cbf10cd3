pub mod realtime;
pub mod rooms;

pub use realtime::CloudflareRealtimeClient;
pub use rooms::RoomLifecycleService;
