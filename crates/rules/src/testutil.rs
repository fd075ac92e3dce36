//! Shared event builders for rule tests.

use chrono::{DateTime, FixedOffset};

use sentinel_core::{EventBase, Location, TimeWindow, TrajectoryEvent};

pub fn dt(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

pub fn window(start: &str, end: &str) -> TimeWindow {
    TimeWindow::exact(dt(start), dt(end)).unwrap()
}

pub fn city(name: &str) -> Location {
    Location::new(name).unwrap()
}

pub fn base(id: &str, user: &str, amount: f64, start: &str, end: &str) -> EventBase {
    EventBase {
        event_id: id.into(),
        user_id: user.into(),
        user_name: "张三".into(),
        department: "销售部".into(),
        amount,
        remark: String::new(),
        time_window: window(start, end),
    }
}

pub fn taxi(
    id: &str,
    user: &str,
    amount: f64,
    from: &str,
    to: &str,
    start: &str,
    end: &str,
) -> TrajectoryEvent {
    TrajectoryEvent::taxi(base(id, user, amount, start, end), city(from), city(to), false).unwrap()
}

pub fn flight(
    id: &str,
    user: &str,
    from: &str,
    to: &str,
    start: &str,
    end: &str,
) -> TrajectoryEvent {
    TrajectoryEvent::flight(
        base(id, user, 1200.0, start, end),
        city(from),
        city(to),
        "MU5301",
    )
    .unwrap()
}

pub fn hotel(
    id: &str,
    user: &str,
    in_city: &str,
    amount: f64,
    start: &str,
    end: &str,
) -> TrajectoryEvent {
    TrajectoryEvent::hotel(base(id, user, amount, start, end), city(in_city), "如家酒店", "标准间")
        .unwrap()
}

pub fn checkin(id: &str, user: &str, in_city: &str, start: &str, end: &str) -> TrajectoryEvent {
    TrajectoryEvent::daily_check_in(base(id, user, 0.0, start, end), city(in_city), "客户拜访")
        .unwrap()
}
