use super::types::{Deposit, UserProfile};

/// Year-by-year savings schedule from `age` up to the year before
/// `retirement_age`. Salary grows at the profile's rate and spending at
/// `spending_inflation`; a deficit year deposits nothing.
pub fn build_deposit_timeline(
    profile: &UserProfile,
    start_year: i32,
    spending_inflation: f64,
) -> Vec<Deposit> {
    let working_years = profile.working_years();
    let mut timeline = Vec::with_capacity(working_years as usize);

    let mut salary = profile.annual_salary;
    let mut monthly_spend = profile.monthly_spend;
    for i in 0..working_years {
        let monthly_deposit = (salary / 12.0 - monthly_spend).max(0.0);
        timeline.push(Deposit {
            year: start_year + i as i32,
            age: profile.age + i,
            monthly_deposit,
        });

        salary *= 1.0 + profile.salary_growth / 100.0;
        monthly_spend *= 1.0 + spending_inflation;
    }

    timeline
}
