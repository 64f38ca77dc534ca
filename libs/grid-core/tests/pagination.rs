use grid_core::{calculate_pages, calculate_pagination, Error, PageLayout, PaginationMethod};

fn layout(pages: u64, per_page: u64) -> PageLayout {
    PageLayout { pages, per_page }
}

#[test]
fn throttle_below_one_is_rejected_with_its_value() {
    for throttle in [0, -1, -100] {
        let err = calculate_pagination(10, PaginationMethod::Single, 100, throttle).unwrap_err();
        assert_eq!(err, Error::InvalidThrottle(throttle));
        assert!(err.to_string().contains(&format!("[{throttle}]")));
    }
}

#[test]
fn group_exact_threshold_spreads_over_throttle_pages() {
    assert_eq!(
        calculate_pagination(100, PaginationMethod::Group, 100, 10),
        Ok(layout(10, 10))
    );
}

#[test]
fn group_below_threshold_is_one_page() {
    assert_eq!(
        calculate_pagination(90, PaginationMethod::Group, 100, 10),
        Ok(layout(1, 90))
    );
}

#[test]
fn group_above_threshold_grows_page_size() {
    assert_eq!(
        calculate_pagination(120, PaginationMethod::Group, 100, 10),
        Ok(layout(10, 12))
    );
    assert_eq!(
        calculate_pagination(170, PaginationMethod::Group, 100, 10),
        Ok(layout(10, 17))
    );
    assert_eq!(
        calculate_pagination(171, PaginationMethod::Group, 100, 10),
        Ok(layout(10, 18))
    );
}

#[test]
fn group_reports_only_pages_that_hold_rows() {
    let l = calculate_pagination(101, PaginationMethod::Group, 100, 1).unwrap();
    assert_eq!(l, layout(51, 2));

    // the page window agrees with the layout at the last page
    let w = calculate_pages(101, 60, l.per_page);
    assert_eq!(w.page, l.pages);
    assert_eq!(w.previous_page, Some(50));
    assert_eq!(w.next_page, None);
}

#[test]
fn single_uses_throttle_as_page_size() {
    assert_eq!(
        calculate_pagination(1200, PaginationMethod::Single, 100, 100),
        Ok(layout(12, 100))
    );
    assert_eq!(
        calculate_pagination(12000, PaginationMethod::Single, 100, 100),
        Ok(layout(120, 100))
    );
    assert_eq!(
        calculate_pagination(1201, PaginationMethod::Single, 100, 100),
        Ok(layout(13, 100))
    );
}

#[test]
fn first_page_has_no_previous() {
    let w = calculate_pages(30, 1, 10);
    assert_eq!(w.page, 1);
    assert_eq!(w.previous_page, None);
    assert_eq!(w.next_page, Some(2));
}

#[test]
fn middle_page_has_both_neighbours() {
    let w = calculate_pages(30, 2, 10);
    assert_eq!(w.previous_page, Some(1));
    assert_eq!(w.next_page, Some(3));
}

#[test]
fn last_page_has_no_next() {
    let w = calculate_pages(30, 3, 10);
    assert_eq!(w.page, 3);
    assert_eq!(w.previous_page, Some(2));
    assert_eq!(w.next_page, None);
}

#[test]
fn single_page_has_no_neighbours() {
    let w = calculate_pages(10, 1, 10);
    assert_eq!(w.previous_page, None);
    assert_eq!(w.next_page, None);
}
