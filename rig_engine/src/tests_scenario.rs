#[cfg(test)]
mod tests {
    use crate::model::ModelEngine;
    use crate::sim::{HeadlessModel, KeyframeClip, demo_model};
    use crate::{Channel, Controller, ControllerCommand, Session, SharedSpectrum, gaze};
    use rig_shared::{
        ControllerConfig, MotionDefinition, PARAM_CHEEK, PARAM_EYE_L_OPEN, PARAM_EYE_R_OPEN,
        PARAM_MOUTH_OPEN_Y, SequenceStep,
    };
    use std::thread;

    const FRAME_MS: f64 = 16.0;

    fn demo_controller(seed: u64) -> Controller<HeadlessModel> {
        let model = demo_model();
        let settings = model.settings(&["f_01.exp3.json", "f_02.exp3.json", "f_03.exp3.json"]);
        Controller::with_seed(model, settings, ControllerConfig::default(), seed)
    }

    fn value(pose: &[(String, f32)], id: &str) -> f32 {
        pose.iter().rev().find(|(p, _)| p == id).map(|(_, v)| *v).unwrap_or(f32::NAN)
    }

    fn last_write(writes: &[(String, f32)], id: &str) -> Option<f32> {
        writes.iter().rev().find(|(p, _)| p == id).map(|(_, v)| *v)
    }

    fn run(c: &mut Controller<HeadlessModel>, total_ms: f64) -> Vec<(String, f32)> {
        let mut writes = Vec::new();
        let mut t = 0.0;
        while t < total_ms {
            c.update_frame(FRAME_MS);
            writes.extend(c.engine_mut().take_writes());
            t += FRAME_MS;
        }
        writes
    }

    #[test]
    fn gesture_freezes_on_last_frame() {
        let mut c = demo_controller(1);
        // motion_100 is the 1.5 s gesture at index 1.
        assert!(c.start_motion("Motion", 1));
        let m = c.engine_mut();

        let at_0 = m.pose_at(0.0);
        let at_1 = m.pose_at(1.0);
        assert_ne!(value(&at_0, "ParamAngleX"), value(&at_1, "ParamAngleX"));

        let eps = ControllerConfig::default().freeze_epsilon_secs;
        let last_frame = m.pose_at(1.5 - eps);
        assert_eq!(m.pose_at(1.5), last_frame);
        assert_eq!(m.pose_at(5.0), last_frame);
        assert_eq!(m.pose_at(5.0), last_frame);
        assert!(value(&last_frame, "ParamAngleX") > 29.9);

        // Same through real frames: still active, still frozen.
        for _ in 0..50 {
            c.update_frame(100.0);
        }
        assert_eq!(c.engine().active_motion(), Some("motion_100"));
        let x = c.engine().parameter("ParamAngleX").unwrap();
        assert!((x - value(&last_frame, "ParamAngleX")).abs() < 1e-3, "angle {x}");
    }

    #[test]
    fn idle_clip_restarts_every_cycle() {
        let mut c = demo_controller(1);
        assert!(c.start_motion("Motion", 0));
        let m = c.engine_mut();
        let start = m.pose_at(0.0);
        let mid = m.pose_at(1.5);
        assert_ne!(start, mid);
        for cycle in 1..4 {
            let d = 3.0 * cycle as f64;
            let pose = m.pose_at(d);
            assert!((value(&pose, "ParamAngleX") - value(&start, "ParamAngleX")).abs() < 1e-4);
            let pose = m.pose_at(d + 1.5);
            assert!((value(&pose, "ParamAngleX") - value(&mid, "ParamAngleX")).abs() < 1e-3);
        }
    }

    #[test]
    fn manual_overrides_win_every_frame() {
        // A gesture that fights for the eyes and the cheek.
        let model = HeadlessModel::new((1000.0, 2000.0)).with_motion(
            "Motion",
            MotionDefinition::named("motion_100"),
            KeyframeClip::new(Some(1.0))
                .with_curve(PARAM_EYE_L_OPEN, vec![(0.0, 1.0), (1.0, 0.2)])
                .with_curve(PARAM_CHEEK, vec![(0.0, -1.0), (1.0, 0.5)]),
        );
        let settings = model.settings(&[]);
        let mut c = Controller::with_seed(model, settings, ControllerConfig::default(), 5);
        c.start_motion("Motion", 0);
        c.set_cheek(2.0, false);
        c.set_eye_closed(true, true);

        for _ in 0..120 {
            c.update_frame(FRAME_MS);
            let writes = c.engine_mut().take_writes();
            let eye = c.override_cell(Channel::Eye).value;
            assert_eq!(last_write(&writes, PARAM_EYE_L_OPEN), Some(eye));
            assert_eq!(last_write(&writes, PARAM_EYE_R_OPEN), Some(eye));
            assert_eq!(last_write(&writes, PARAM_CHEEK), Some(2.0));
        }
        assert_eq!(c.override_cell(Channel::Eye).value, 0.0);
    }

    #[test]
    fn opening_unlocked_eyes_hands_back_to_blink() {
        let mut c = demo_controller(9);
        c.set_eye_closed(true, false);
        run(&mut c, 400.0);
        assert!(c.override_cell(Channel::Eye).manual_active);
        assert_eq!(c.engine().parameter(PARAM_EYE_L_OPEN), Some(0.0));

        c.set_eye_closed(false, false);
        run(&mut c, 400.0);
        assert!(!c.override_cell(Channel::Eye).manual_active);

        // Blink is the only thing left touching the eyes.
        let writes = run(&mut c, 9000.0);
        let blinked = writes.iter().any(|(p, v)| p == PARAM_EYE_L_OPEN && *v < 0.5);
        assert!(blinked, "no blink after release");
    }

    #[test]
    fn cancelled_sequence_never_applies_later_steps() {
        let mut c = demo_controller(2);
        let steps: Vec<SequenceStep> = (1..=5)
            .map(|i| SequenceStep {
                cheek: Some(i as f32),
                face_index: Some(i % 3),
                time_ms: 200.0,
                ..Default::default()
            })
            .collect();
        c.play_steps(&steps);
        assert_eq!(c.override_cell(Channel::Cheek).value, 1.0);

        for _ in 0..4 {
            c.update_frame(50.0);
        }
        assert_eq!(c.override_cell(Channel::Cheek).value, 2.0);
        assert_eq!(c.engine().current_expression(), Some(2));

        c.cancel_sequence();
        c.cancel_sequence();
        assert!(!c.is_playing());
        assert_eq!(c.pending_timers(), 0);
        // Only writes made after the cancel count.
        c.engine_mut().take_writes();

        let writes = run(&mut c, 2000.0);
        let cheek: Vec<f32> =
            writes.iter().filter(|(p, _)| p == PARAM_CHEEK).map(|(_, v)| *v).collect();
        assert!(!cheek.is_empty());
        assert!(cheek.iter().all(|v| *v == 2.0), "cheek writes after cancel: {cheek:?}");
        assert_eq!(c.engine().current_expression(), Some(2));
    }

    #[test]
    fn zero_dwell_steps_run_one_per_pass() {
        let mut c = demo_controller(2);
        c.play_steps(&[
            SequenceStep { cheek: Some(1.0), ..Default::default() },
            SequenceStep { cheek: Some(2.0), time_ms: -5.0, ..Default::default() },
            SequenceStep { cheek: Some(-1.0), time_ms: f64::NAN, ..Default::default() },
        ]);
        assert_eq!(c.override_cell(Channel::Cheek).value, 1.0);
        c.update_frame(FRAME_MS);
        assert_eq!(c.override_cell(Channel::Cheek).value, 2.0);
        c.update_frame(FRAME_MS);
        assert_eq!(c.override_cell(Channel::Cheek).value, -1.0);
        c.update_frame(FRAME_MS);
        assert!(!c.is_playing());
    }

    #[test]
    fn random_personality_over_many_clicks() {
        let mut c = demo_controller(2024);
        let rx = c.subscribe_random_choices();
        let n = 200;
        let mut closed = 0;
        for _ in 0..n {
            let choice = c.click_play_random().expect("demo rig has gestures");
            let def = c.settings().motion(&choice.motion_group, choice.motion_index).unwrap();
            assert!(!def.is_idle_category(), "picked idle {}", def.display_name());
            assert_ne!(c.engine().active_motion(), Some("motion_000"));
            closed += choice.eye_close as usize;
            c.update_frame(FRAME_MS);
        }
        assert_eq!(rx.try_iter().count(), n);
        let rate = closed as f64 / n as f64;
        assert!((rate - 0.3).abs() < 0.1, "eye-closed rate {rate}");
    }

    #[test]
    fn mic_overrides_manual_mouth_until_released() {
        let mut c = demo_controller(4);
        c.set_mouth(0.3, false);
        let spectrum = SharedSpectrum::new(1024);
        spectrum.publish(vec![50; 1024]);
        c.set_mic(true, Some(Box::new(spectrum.clone())), vec![0; 1024], 1.0);

        let writes = run(&mut c, 50.0);
        assert_eq!(last_write(&writes, PARAM_MOUTH_OPEN_Y), Some(0.5));

        let capture = spectrum.clone();
        thread::spawn(move || capture.publish(vec![200; 1024])).join().unwrap();
        let writes = run(&mut c, 50.0);
        assert_eq!(last_write(&writes, PARAM_MOUTH_OPEN_Y), Some(1.0));

        c.set_mic_sensitivity(0.0);
        assert!(c.mic_active());

        c.set_mic(false, None, Vec::new(), 1.0);
        let writes = run(&mut c, 50.0);
        assert_eq!(last_write(&writes, PARAM_MOUTH_OPEN_Y), Some(0.3));
        assert_eq!(c.override_cell(Channel::Mouth).value, 0.3);

        assert!(c.clear_mouth_manual_if_unlocked());
        let writes = run(&mut c, 50.0);
        assert_eq!(last_write(&writes, PARAM_MOUTH_OPEN_Y), None);
    }

    #[test]
    fn follow_retries_then_recenters() {
        let mut c = demo_controller(6);
        let point = (750.0, 400.0);
        let expected = gaze::focus_target(point, (1000.0, 2000.0), c.eye_norm_offset(), 1.0);

        c.set_follow_enabled(true, Some(point));
        assert_eq!(c.engine().focus_target(), expected);

        // Each retry re-applies the press position.
        for step in [50.0, 100.0, 200.0] {
            c.engine_mut().focus(0.0, 0.0).unwrap();
            c.update_frame(step);
            assert_eq!(c.engine().focus_target(), expected);
        }
        c.engine_mut().focus(0.0, 0.0).unwrap();
        c.update_frame(500.0);
        assert_eq!(c.engine().focus_target(), (0.0, 0.0));

        c.pointer_moved(0.0, 0.0);
        assert_ne!(c.engine().focus_target(), (0.0, 0.0));
        c.set_follow_enabled(false, None);
        assert_eq!(c.engine().focus_target(), (0.0, 0.0));
    }

    #[test]
    fn follow_released_before_retries_stays_centered() {
        let mut c = demo_controller(6);
        c.set_follow_enabled(true, Some((900.0, 100.0)));
        c.set_follow_enabled(false, None);
        assert_eq!(c.pending_timers(), 0);
        c.update_frame(400.0);
        assert_eq!(c.engine().focus_target(), (0.0, 0.0));

        c.set_follow_sensitivity(Some(0.5));
        c.set_follow_enabled(true, Some((1000.0, 1000.0)));
        let (x, _) = c.engine().focus_target();
        assert!((x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn session_drives_the_scenario_end_to_end() {
        let mut s = Session::new();
        s.install(demo_controller(8));
        let stale = s.current_id().unwrap();
        s.install(demo_controller(8));
        let tx = s.channel();

        let command = ControllerCommand::StartMotion { group: "Motion".into(), index: 2 };
        tx.send(crate::Envelope { target: stale, command }).unwrap();
        assert!(s.post(ControllerCommand::StartMotion { group: String::new(), index: 1 }));
        s.frame(FRAME_MS);
        assert_eq!(s.current().unwrap().engine().active_motion(), Some("motion_100"));

        for _ in 0..300 {
            s.frame(FRAME_MS);
        }
        let angle = s.current().unwrap().engine().parameter("ParamAngleX").unwrap();
        assert!(angle > 29.9, "gesture did not hold its last frame: {angle}");
    }
}
