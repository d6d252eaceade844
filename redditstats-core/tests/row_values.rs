use redditstats_core::{Row, Value};

#[test]
fn test_rows_with_nan_compare_equal() {
    let row = || {
        Row::new()
            .with("subreddit", "golang")
            .with("post_count", 1_i64)
            .with("score_stddev", f64::NAN)
    };
    assert_eq!(row(), row());
    assert_eq!(Value::Float(f64::NAN), Value::Float(-f64::NAN));
}

#[test]
fn test_value_equality_by_variant() {
    assert_eq!(Value::Float(2.5), Value::Float(2.5));
    assert_ne!(Value::Float(f64::NAN), Value::Float(0.0));
    assert_ne!(Value::Float(f64::NAN), Value::Null);
    assert_ne!(Value::Int(1), Value::Float(1.0));
    assert_eq!(Value::from(None::<i64>), Value::Null);

    let left = Row::new().with("avg_score", 1.0);
    let right = Row::new().with("avg_score", f64::NAN);
    assert_ne!(left, right);
}
