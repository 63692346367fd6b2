use foundation::time::Time;

/// Frame metadata handed to every tick, stamped with the host timestamp.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame.
    pub dt_s: f64,
    /// Host time at the start of the frame (seconds).
    pub time: Time,
}

impl Frame {
    pub fn at(index: u64, time: Time, dt_s: f64) -> Self {
        Self { index, dt_s, time }
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use foundation::time::Time;

    #[test]
    fn keeps_host_time_as_given() {
        let f = Frame::at(3, Time::from_millis(1050.0), 0.016);
        assert_eq!(f.index, 3);
        assert_eq!(f.time, Time(1.05));
        assert_eq!(f.dt_s, 0.016);
    }
}
