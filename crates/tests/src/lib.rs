//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置快照测试
//! - 模拟 e2e 测试（无需真实跟踪后端）
//! - 同步/排序跨模块属性测试

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    const STEREO_TOML: &str = r#"
[rig]
base_frame = "base_link"
num_input_masks = 2

[[rig.cameras]]
name = "cam_left"
optical_frame = "cam_left_optical"

[[rig.cameras]]
name = "cam_right"
optical_frame = "cam_right_optical"
translation = [0.12, 0.0, 0.0]

[sync]
matching_threshold_ms = 5.0
image_buffer_size = 100

[imu]
enable_fusion = true
frame = "imu"
"#;

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_blueprint_round_trip() {
        let blueprint = ConfigLoader::load_from_str(STEREO_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.num_cameras(), 2);
        assert_eq!(blueprint.num_streams(), 4);

        // TOML -> blueprint -> JSON -> blueprint 保持语义
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reparsed = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reparsed.num_streams(), blueprint.num_streams());
        assert_eq!(reparsed.min_streams(), blueprint.min_streams());
        assert!(reparsed.imu.enable_fusion);
    }
}

#[cfg(test)]
mod sequencing_tests {
    use bytes::Bytes;
    use contracts::{ImageData, ImageFormat, ImuSample};
    use sync_engine::{Sequencer, SequencerParams, Synchronizer, SynchronizerParams};

    const MS: i64 = 1_000_000;

    fn image() -> ImageData {
        ImageData {
            width: 4,
            height: 4,
            format: ImageFormat::Mono8,
            data: Bytes::from_static(&[0u8; 16]),
        }
    }

    /// Synchronizer -> Sequencer 级联：乱序到达的图像与惯性数据
    /// 仍然产生全局有序的 SequencedUpdate 流。
    #[test]
    fn test_sequenced_updates_are_globally_ordered() {
        let mut synchronizer = Synchronizer::new(SynchronizerParams {
            num_cameras: 2,
            num_masks: 0,
            jitter_tolerance_ns: 5 * MS,
            min_streams: 2,
            buffer_size: 16,
        });
        let mut sequencer = Sequencer::new(SequencerParams {
            imu_buffer_size: 64,
            imu_jitter_threshold_ns: 10 * MS,
        });

        // 惯性数据乱序到达
        for ts in [30, 10, 20, 90, 50, 70] {
            sequencer.push_inertial(ts * MS, ImuSample::default());
        }

        let mut updates = Vec::new();
        // 第二路相机先于第一路到达
        for base in [40i64, 80, 120] {
            if let Some(batch) = synchronizer.add_message(1, (base + 1) * MS, image()) {
                updates.push(sequencer.push_batch(batch));
            }
            if let Some(batch) = synchronizer.add_message(0, base * MS, image()) {
                updates.push(sequencer.push_batch(batch));
            }
        }

        assert!(!updates.is_empty());

        let mut last_ts = i64::MIN;
        for update in &updates {
            // 惯性样本不晚于批代表时间戳，且全局非递减
            for imu in &update.imu {
                assert!(imu.timestamp_ns >= last_ts);
                assert!(imu.timestamp_ns <= update.batch.timestamp_ns);
                last_ts = imu.timestamp_ns;
            }
            last_ts = last_ts.max(update.batch.timestamp_ns);
        }

        // 每个样本只释放一次
        let released: usize = updates.iter().map(|u| u.imu.len()).sum();
        assert!(released <= 6);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CameraInfo, FusionBlueprint, ImageData, ImageFormat, ImuSample};
    use node::{FusionNode, GateState, StaticTransforms, TrackingOutput};
    use tracker::{CompletionMode, MockEngineConfig, MockEngineFactory, MockState};

    const MS: i64 = 1_000_000;

    const PIPELINE_TOML: &str = r#"
[rig]
base_frame = "base_link"
num_input_masks = 2

[[rig.cameras]]
name = "cam_left"

[[rig.cameras]]
name = "cam_right"
translation = [0.12, 0.0, 0.0]

[sync]
matching_threshold_ms = 5.0
image_buffer_size = 32

[imu]
enable_fusion = true
frame = "imu"

[mapping]
enable = true
"#;

    fn image(format: ImageFormat) -> ImageData {
        ImageData {
            width: 8,
            height: 8,
            format,
            data: Bytes::from_static(&[0u8; 64]),
        }
    }

    fn camera_info(frame_id: &str) -> CameraInfo {
        CameraInfo {
            frame_id: frame_id.to_string(),
            width: 640,
            height: 480,
            focal: [500.0, 500.0],
            principal: [320.0, 240.0],
            distortion: vec![],
        }
    }

    fn build_node(
        blueprint: FusionBlueprint,
        factory: MockEngineFactory,
    ) -> (
        Arc<FusionNode>,
        Arc<MockState>,
        Arc<Mutex<Vec<TrackingOutput>>>,
    ) {
        let state = factory.state();
        let node = FusionNode::new(
            blueprint,
            Arc::new(factory),
            Arc::new(StaticTransforms::new()),
        );
        let outputs: Arc<Mutex<Vec<TrackingOutput>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outputs);
        node.set_output(Box::new(move |output| {
            sink.lock().unwrap().push(output.clone());
        }));
        (node, state, outputs)
    }

    /// 端到端：双目 + 掩码 + 惯性数据 -> 跟踪输出
    ///
    /// 验证完整的数据流：
    /// 1. 相机信息与首个惯性样本完成就绪门
    /// 2. 同步器按批产出双目批（掩码随行）
    /// 3. 排序器在批前释放惯性样本
    /// 4. 跟踪输出带速度与协方差
    #[test]
    fn test_e2e_stereo_imu_pipeline() {
        let blueprint = ConfigLoader::load_from_str(PIPELINE_TOML, ConfigFormat::Toml).unwrap();
        let (node, state, outputs) = build_node(blueprint, MockEngineFactory::default());

        node.submit_camera_info(0, camera_info("cam_left_optical"))
            .unwrap();
        node.submit_camera_info(1, camera_info("cam_right_optical"))
            .unwrap();
        assert_eq!(node.gate_state(), GateState::AwaitingSensors);

        // 首个惯性样本完成就绪集
        node.submit_inertial(5 * MS, ImuSample::default()).unwrap();
        assert_eq!(node.gate_state(), GateState::Initialized);

        for tick in 1..=5i64 {
            let ts = tick * 100 * MS;
            node.submit_inertial(ts - 10 * MS, ImuSample::default())
                .unwrap();
            // 批内抖动在阈值以内
            node.submit_image(0, ts, image(ImageFormat::Mono8));
            node.submit_image(2, ts, image(ImageFormat::Mask8));
            node.submit_image(3, ts + 2 * MS, image(ImageFormat::Mask8));
            node.submit_image(1, ts + 2 * MS, image(ImageFormat::Mono8));
        }

        assert_eq!(state.track_calls.load(Ordering::Relaxed), 5);
        assert_eq!(state.imu_registered.load(Ordering::Relaxed), 5);

        let outputs = outputs.lock().unwrap();
        assert_eq!(outputs.len(), 5);

        // 批时间戳严格递增
        for pair in outputs.windows(2) {
            assert!(pair[1].timestamp_ns > pair[0].timestamp_ns);
        }

        // 0.1 m/步, 100 ms/步 -> 1.0 m/s
        let last = outputs.last().unwrap();
        assert!((last.velocity[0] - 1.0).abs() < 1e-9);
    }

    /// 并发生产者：相机线程与惯性线程并发提交不死锁、不 panic
    #[test]
    fn test_concurrent_producers() {
        let blueprint = ConfigLoader::load_from_str(PIPELINE_TOML, ConfigFormat::Toml).unwrap();
        let (node, state, outputs) = build_node(blueprint, MockEngineFactory::default());

        node.submit_camera_info(0, camera_info("cam_left_optical"))
            .unwrap();
        node.submit_camera_info(1, camera_info("cam_right_optical"))
            .unwrap();
        node.submit_inertial(MS, ImuSample::default()).unwrap();

        let imu_feeder = {
            let node = Arc::clone(&node);
            std::thread::spawn(move || {
                for tick in 1..=200i64 {
                    if node.submit_inertial(tick * 10 * MS, ImuSample::default()).is_err() {
                        break;
                    }
                    std::thread::sleep(Duration::from_micros(200));
                }
            })
        };
        let camera_feeder = {
            let node = Arc::clone(&node);
            std::thread::spawn(move || {
                for tick in 1..=40i64 {
                    let ts = tick * 50 * MS;
                    node.submit_image(0, ts, image(ImageFormat::Mono8));
                    node.submit_image(1, ts, image(ImageFormat::Mono8));
                    node.submit_image(2, ts, image(ImageFormat::Mask8));
                    node.submit_image(3, ts, image(ImageFormat::Mask8));
                    std::thread::sleep(Duration::from_micros(500));
                }
            })
        };

        imu_feeder.join().unwrap();
        camera_feeder.join().unwrap();

        assert_eq!(state.track_calls.load(Ordering::Relaxed), 40);
        assert_eq!(outputs.lock().unwrap().len(), 40);
        assert!(state.imu_registered.load(Ordering::Relaxed) > 0);
    }

    /// 地图生命周期：保存 -> 定位，均在跟踪线程推进下完成
    #[test]
    fn test_map_save_then_localize() {
        let blueprint = ConfigLoader::load_from_str(PIPELINE_TOML, ConfigFormat::Toml).unwrap();
        let (node, state, _outputs) = build_node(blueprint, MockEngineFactory::default());

        node.submit_camera_info(0, camera_info("cam_left_optical"))
            .unwrap();
        node.submit_camera_info(1, camera_info("cam_right_optical"))
            .unwrap();
        node.submit_inertial(5 * MS, ImuSample::default()).unwrap();

        let feed = |tick: i64| {
            let ts = tick * 100 * MS;
            node.submit_image(0, ts, image(ImageFormat::Mono8));
            node.submit_image(1, ts, image(ImageFormat::Mono8));
            node.submit_image(2, ts, image(ImageFormat::Mask8));
            node.submit_image(3, ts, image(ImageFormat::Mask8));
        };
        feed(1);

        // 保存：阻塞请求在后续跟踪步中被解析
        let dir = tempfile::tempdir().unwrap();
        let map_path = dir.path().to_path_buf();
        let saver = {
            let node = Arc::clone(&node);
            let path = map_path.clone();
            std::thread::spawn(move || node.request_save_map(&path))
        };
        let mut tick = 2;
        while !saver.is_finished() {
            feed(tick);
            tick += 1;
            std::thread::sleep(Duration::from_millis(5));
        }
        saver.join().unwrap().unwrap();
        assert_eq!(state.saved_paths.lock().unwrap().as_slice(), &[map_path]);

        // 定位：地图目录需包含数据库文件
        std::fs::write(dir.path().join("map.mdb"), b"").unwrap();
        let hint = contracts::transform_from_parts([0.5, 0.0, 0.0], [0.0; 3]);
        let localizer = {
            let node = Arc::clone(&node);
            let path = dir.path().to_path_buf();
            std::thread::spawn(move || node.request_localize(&path, &hint))
        };
        while !localizer.is_finished() {
            feed(tick);
            tick += 1;
            std::thread::sleep(Duration::from_millis(5));
        }
        let pose = localizer.join().unwrap().unwrap().unwrap();
        assert!((pose.translation.x - 0.5).abs() < 1e-12);
    }

    /// 关闭强制解析未决操作，且幂等
    #[test]
    fn test_shutdown_force_resolves_pending_operations() {
        let blueprint = ConfigLoader::load_from_str(PIPELINE_TOML, ConfigFormat::Toml).unwrap();
        let factory = MockEngineFactory::new(MockEngineConfig {
            completion_mode: CompletionMode::Never,
            ..Default::default()
        });
        let (node, _state, _outputs) = build_node(blueprint, factory);

        node.submit_camera_info(0, camera_info("cam_left_optical"))
            .unwrap();
        node.submit_camera_info(1, camera_info("cam_right_optical"))
            .unwrap();
        node.submit_inertial(5 * MS, ImuSample::default()).unwrap();

        let saver = {
            let node = Arc::clone(&node);
            std::thread::spawn(move || node.request_save_map(std::path::Path::new("/tmp/map")))
        };
        std::thread::sleep(Duration::from_millis(30));

        node.shutdown();
        assert!(saver.join().unwrap().is_err());

        node.shutdown();
        assert_eq!(node.gate_state(), GateState::AwaitingSensors);
    }
}
