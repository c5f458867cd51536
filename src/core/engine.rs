use tracing::debug;

use super::error::ProjectionError;
use super::types::{EventType, FinancialEvent, Scenario, SimulationParams, YearlyData};

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveLoan {
    end_year: u32,
    annual_payment: f64,
}

/// Loans still being repaid. Appended on origination, filtered on expiry.
#[derive(Debug, Default)]
struct LoanPool {
    loans: Vec<ActiveLoan>,
}

impl LoanPool {
    fn register(&mut self, loan: ActiveLoan) {
        self.loans.push(loan);
    }

    fn payments_due(&self, year: u32) -> f64 {
        self.loans
            .iter()
            .filter(|loan| year <= loan.end_year)
            .map(|loan| loan.annual_payment)
            .sum()
    }

    fn expire(&mut self, year: u32) {
        self.loans.retain(|loan| loan.end_year > year);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LoanTerms {
    principal: f64,
    annual_payment: f64,
    years: u32,
}

impl LoanTerms {
    fn originated_in(self, year: u32) -> ActiveLoan {
        ActiveLoan {
            end_year: year + self.years - 1,
            annual_payment: self.annual_payment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EventAction {
    Deposit { amount: f64 },
    Withdrawal { amount: f64 },
    Loan(LoanTerms),
    LeverageLoan(LoanTerms),
}

/// A validated event together with the inclusive range of years it fires in.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledEvent {
    first_year: u32,
    last_year: u32,
    action: EventAction,
}

impl ScheduledEvent {
    fn fires_in(&self, year: u32) -> bool {
        (self.first_year..=self.last_year).contains(&year)
    }
}

#[derive(Debug, Clone, Copy)]
struct GrowthOutcome {
    gross_profit: f64,
    tax: f64,
    real_tax: f64,
    net_profit: f64,
}

#[derive(Debug)]
struct ProjectionState {
    capital: f64,
    total_invested: f64,
    total_withdrawn: f64,
    standard_loans: LoanPool,
    leverage_loans: LoanPool,
}

impl ProjectionState {
    fn new(params: &SimulationParams) -> Self {
        Self {
            capital: params.initial_capital,
            total_invested: params.initial_capital,
            total_withdrawn: 0.0,
            standard_loans: LoanPool::default(),
            leverage_loans: LoanPool::default(),
        }
    }

    fn opening_snapshot(&self, params: &SimulationParams) -> YearlyData {
        YearlyData {
            year: 0,
            label: calendar_label(params, 0),
            portfolio_value: round_cents(self.capital),
            total_invested: round_cents(self.total_invested),
            total_withdrawn: 0.0,
            yearly_profit: 0.0,
            yearly_tax: 0.0,
            yearly_real_tax: 0.0,
            net_growth: 0.0,
            inflation_adjusted_value: round_cents(self.capital),
            total_inflation_loss: 0.0,
        }
    }

    fn advance(
        &mut self,
        params: &SimulationParams,
        schedule: &[ScheduledEvent],
        year: u32,
    ) -> Result<YearlyData, ProjectionError> {
        let factor = inflation_factor(params.inflation_rate, year);

        let growth = self.apply_growth(params, factor);
        let leverage_payments = self.leverage_loans.payments_due(year);
        let gross_contribution = self.apply_contribution(params, factor, leverage_payments);
        self.service_standard_loans(year);

        for event in schedule.iter().filter(|event| event.fires_in(year)) {
            self.apply_event(event.action, year, gross_contribution);
        }

        // Checked before clamping: `max` would turn a NaN balance into zero.
        ensure_finite(
            year,
            [
                ("portfolioValue", self.capital),
                ("totalInvested", self.total_invested),
                ("totalWithdrawn", self.total_withdrawn),
            ],
        )?;
        self.capital = self.capital.max(0.0);

        let real_value = self.capital / factor;
        let snapshot = YearlyData {
            year,
            label: calendar_label(params, year),
            portfolio_value: round_cents(self.capital),
            total_invested: round_cents(self.total_invested),
            total_withdrawn: round_cents(self.total_withdrawn),
            yearly_profit: round_cents(growth.gross_profit),
            yearly_tax: round_cents(growth.tax),
            yearly_real_tax: round_cents(growth.real_tax),
            net_growth: round_cents(growth.net_profit),
            inflation_adjusted_value: round_cents(real_value),
            total_inflation_loss: round_cents(self.capital - real_value),
        };
        ensure_finite(
            year,
            [
                ("portfolioValue", snapshot.portfolio_value),
                ("totalInvested", snapshot.total_invested),
                ("totalWithdrawn", snapshot.total_withdrawn),
                ("yearlyProfit", snapshot.yearly_profit),
                ("yearlyTax", snapshot.yearly_tax),
                ("yearlyRealTax", snapshot.yearly_real_tax),
                ("netGrowth", snapshot.net_growth),
                ("inflationAdjustedValue", snapshot.inflation_adjusted_value),
                ("totalInflationLoss", snapshot.total_inflation_loss),
            ],
        )?;

        self.standard_loans.expire(year);
        self.leverage_loans.expire(year);
        Ok(snapshot)
    }

    fn apply_growth(&mut self, params: &SimulationParams, factor: f64) -> GrowthOutcome {
        let gross_profit = self.capital * (params.annual_return_rate / 100.0);

        let taxable = if params.is_tax_enabled && params.tax_adjusted_for_inflation {
            let inflation_cost = self.capital * (params.inflation_rate / 100.0);
            (gross_profit - inflation_cost).max(0.0)
        } else {
            gross_profit
        };

        // Loss years never produce a negative tax.
        let tax = if params.is_tax_enabled && taxable > 0.0 {
            taxable * (params.tax_rate / 100.0)
        } else {
            0.0
        };

        let net_profit = gross_profit - tax;
        self.capital += net_profit;

        GrowthOutcome {
            gross_profit,
            tax,
            real_tax: tax / factor,
            net_profit,
        }
    }

    /// Adds the year's contribution net of leverage installments and returns
    /// the gross contribution. A shortfall is drawn from the portfolio.
    fn apply_contribution(
        &mut self,
        params: &SimulationParams,
        factor: f64,
        leverage_payments: f64,
    ) -> f64 {
        let mut gross = params.monthly_contribution * 12.0;
        if params.adjust_contribution_for_inflation {
            gross *= factor;
        }

        self.total_invested += gross;

        let net_to_portfolio = gross - leverage_payments;
        self.capital += net_to_portfolio;
        if net_to_portfolio < 0.0 {
            self.total_withdrawn += net_to_portfolio.abs();
        }
        gross
    }

    fn service_standard_loans(&mut self, year: u32) {
        let payments = self.standard_loans.payments_due(year);
        self.capital -= payments;
        self.total_withdrawn += payments;
    }

    fn apply_event(&mut self, action: EventAction, year: u32, gross_contribution: f64) {
        match action {
            EventAction::Deposit { amount } => {
                self.capital += amount;
                self.total_invested += amount;
            }
            EventAction::Withdrawal { amount } => {
                self.capital -= amount;
                self.total_withdrawn += amount;
                self.total_invested -= amount;
            }
            EventAction::Loan(terms) => {
                let loan = terms.originated_in(year);
                debug!(
                    year,
                    principal = terms.principal,
                    annual_payment = terms.annual_payment,
                    end_year = loan.end_year,
                    "standard loan originated"
                );
                self.standard_loans.register(loan);

                // Principal goes to the user, the first installment leaves the portfolio now.
                self.capital -= terms.annual_payment;
                self.total_withdrawn += terms.annual_payment;
                self.total_invested += terms.principal;
            }
            EventAction::LeverageLoan(terms) => {
                let loan = terms.originated_in(year);
                debug!(
                    year,
                    principal = terms.principal,
                    annual_payment = terms.annual_payment,
                    end_year = loan.end_year,
                    "leverage loan originated"
                );
                self.leverage_loans.register(loan);

                self.capital += terms.principal;
                self.capital -= terms.annual_payment;
                if terms.annual_payment > gross_contribution {
                    self.total_withdrawn += terms.annual_payment - gross_contribution;
                }
                self.total_invested += terms.principal;
            }
        }
    }
}

/// Runs the year-by-year projection. The result holds `duration_years + 1`
/// snapshots, starting with the opening balance at year 0.
pub fn project(
    params: &SimulationParams,
    events: &[FinancialEvent],
) -> Result<Vec<YearlyData>, ProjectionError> {
    let schedule = validate_params(params)
        .and_then(|()| schedule_events(params, events))
        .inspect_err(|err| debug!(%err, "projection input rejected"))?;

    let mut state = ProjectionState::new(params);
    let mut years = Vec::with_capacity(params.duration_years as usize + 1);
    years.push(state.opening_snapshot(params));
    for year in 1..=params.duration_years {
        let snapshot = state
            .advance(params, &schedule, year)
            .inspect_err(|err| debug!(%err, "projection diverged"))?;
        years.push(snapshot);
    }

    debug!(
        years = params.duration_years,
        events = events.len(),
        final_value = years.last().map(|row| row.portfolio_value),
        "projection complete"
    );
    Ok(years)
}

pub fn project_scenario(scenario: &Scenario) -> Result<Vec<YearlyData>, ProjectionError> {
    project(&scenario.params, &scenario.events)
}

/// Fixed yearly installment that repays `principal` over `years` at `rate_percent`.
pub fn annuity_payment(principal: f64, rate_percent: f64, years: u32) -> f64 {
    let n = years.max(1);
    let rate = rate_percent / 100.0;
    if rate == 0.0 {
        return principal / n as f64;
    }
    // Discount form: stays finite for long terms where (1 + r)^n overflows.
    let discount = (1.0 + rate).powi(-i32::try_from(n).unwrap_or(i32::MAX));
    principal * rate / (1.0 - discount)
}

pub(crate) fn round_cents(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        // Magnitudes this large carry no cents.
        return value;
    }
    scaled.round() / 100.0
}

fn inflation_factor(inflation_rate: f64, year: u32) -> f64 {
    (1.0 + inflation_rate / 100.0).powi(year as i32)
}

fn ensure_finite<const N: usize>(
    year: u32,
    values: [(&'static str, f64); N],
) -> Result<(), ProjectionError> {
    match values.into_iter().find(|(_, value)| !value.is_finite()) {
        Some((name, _)) => Err(ProjectionError::NonFiniteValue { year, name }),
        None => Ok(()),
    }
}

fn calendar_label(params: &SimulationParams, year: u32) -> String {
    (i64::from(params.start_year) + i64::from(year)).to_string()
}

fn validate_params(params: &SimulationParams) -> Result<(), ProjectionError> {
    if params.duration_years < 1 {
        return Err(ProjectionError::InvalidDuration {
            years: params.duration_years,
        });
    }

    for (name, value) in [
        ("initialCapital", params.initial_capital),
        ("monthlyContribution", params.monthly_contribution),
        ("annualReturnRate", params.annual_return_rate),
        ("taxRate", params.tax_rate),
        ("inflationRate", params.inflation_rate),
        ("targetMonthlyIncome", params.target_monthly_income),
    ] {
        if !value.is_finite() {
            return Err(ProjectionError::NonFiniteParameter { name });
        }
    }

    if params.inflation_rate <= -100.0 {
        return Err(ProjectionError::InvalidInflationRate {
            rate: params.inflation_rate,
        });
    }

    Ok(())
}

fn schedule_events(
    params: &SimulationParams,
    events: &[FinancialEvent],
) -> Result<Vec<ScheduledEvent>, ProjectionError> {
    events
        .iter()
        .map(|event| schedule_event(params, event))
        .collect()
}

fn schedule_event(
    params: &SimulationParams,
    event: &FinancialEvent,
) -> Result<ScheduledEvent, ProjectionError> {
    if event.year < 1 {
        return Err(ProjectionError::InvalidEventYear {
            id: event.id.clone(),
            year: event.year,
        });
    }
    if !event.amount.is_finite() || event.amount <= 0.0 {
        return Err(ProjectionError::InvalidEventAmount {
            id: event.id.clone(),
            amount: event.amount,
        });
    }

    let action = match event.kind {
        EventType::Deposit => EventAction::Deposit {
            amount: event.amount,
        },
        EventType::Withdrawal => EventAction::Withdrawal {
            amount: event.amount,
        },
        EventType::Loan => EventAction::Loan(loan_terms(event)?),
        EventType::LeverageLoan => EventAction::LeverageLoan(loan_terms(event)?),
    };

    // Loans expand into their own repayment schedule, so `is_recurring` is ignored for them.
    let last_year = if event.is_recurring && !event.kind.is_loan() {
        event
            .recurring_end_year
            .filter(|&end| end > 0)
            .unwrap_or(params.duration_years)
    } else {
        event.year
    };

    Ok(ScheduledEvent {
        first_year: event.year,
        last_year,
        action,
    })
}

fn loan_terms(event: &FinancialEvent) -> Result<LoanTerms, ProjectionError> {
    let (Some(rate), Some(years)) = (event.loan_interest_rate, event.loan_duration_years) else {
        return Err(ProjectionError::MissingLoanTerms {
            id: event.id.clone(),
        });
    };
    if years <= 0 {
        return Err(ProjectionError::InvalidLoanDuration {
            id: event.id.clone(),
            years,
        });
    }
    if !rate.is_finite() || rate <= -100.0 {
        return Err(ProjectionError::InvalidLoanRate {
            id: event.id.clone(),
            rate,
        });
    }

    let years = years as u32;
    let annual_payment = annuity_payment(event.amount, rate, years);
    if !annual_payment.is_finite() || annual_payment <= 0.0 {
        return Err(ProjectionError::InvalidLoanPayment {
            id: event.id.clone(),
            payment: annual_payment,
        });
    }
    Ok(LoanTerms {
        principal: event.amount,
        annual_payment,
        years,
    })
}
