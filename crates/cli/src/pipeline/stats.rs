//! Pipeline run statistics.

use std::time::Duration;

use observability::StatsSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Total tracking outputs produced
    pub frames_tracked: u64,

    /// Total images submitted across all streams
    pub images_submitted: u64,

    /// Total inertial samples submitted
    pub imu_submitted: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of image streams that were fed
    pub active_streams: usize,

    /// Estimated linear speed over the run (m/s, sliding window)
    pub speed: StatsSummary,

    /// Estimated angular rate over the run (rad/s, sliding window)
    pub angular_rate: StatsSummary,
}

impl RunStats {
    /// Calculate tracked frames per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_tracked as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames tracked: {}", self.frames_tracked);
        println!("   ├─ Images submitted: {}", self.images_submitted);
        println!("   ├─ IMU samples submitted: {}", self.imu_submitted);
        println!("   ├─ Tracked FPS: {:.2}", self.fps());
        println!("   └─ Active streams: {}", self.active_streams);

        println!("\n📈 Estimation");
        println!("   ├─ Linear speed (m/s): {}", self.speed);
        println!("   └─ Angular rate (rad/s): {}", self.angular_rate);

        println!();
    }
}
