use nmo_tracer::collision::{bracket, bracket_by, bracket_linear, Bracket};

#[test]
fn bracket_matches_linear_scan() {
    for n in 1..=200_i32 {
        let table: Vec<f64> = (0..n).map(|i| f64::from(i).mul_add(0.37, 0.01)).collect();
        let last = *table.last().unwrap();
        let mut queries = vec![-1.0, 0.0, last, last + 1.0e-9, last + 1.0, f64::NAN];
        for w in table.windows(2) {
            queries.push(w[0]);
            queries.push(0.5 * (w[0] + w[1]));
            queries.push(w[1] - 1.0e-12);
        }
        for r in queries {
            let expected = bracket_linear(&table, r);
            assert_eq!(bracket(&table, r), expected, "n={n}, r={r}");
            assert_eq!(bracket_by(table.len(), r, |i| table[i]), expected, "n={n}, r={r}");
        }
        assert_eq!(bracket(&table, last), Bracket::Channel(table.len() - 1));
    }
}
#[test]
fn single_boundary() {
    let table = [0.05];
    for r in [0.0, 0.049, 0.05, 0.051, 1.0] {
        match bracket(&table, r) {
            Bracket::Channel(i) => assert_eq!(i, 0),
            Bracket::Miss => assert!(r != 0.05),
        }
    }
}
