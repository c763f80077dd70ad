use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, MySqlPool, Transaction};

use crate::model::bonus::{Bonus, BonusFrequency};
use crate::model::employee::{Employee, EmployeeProfile, EmploymentType};
use crate::model::loan::Loan;
use crate::model::payslip::{BonusLine, DeductionLine, LoanDeductionLine, Payslip};
use crate::model::time_record::{
    DailyAttendanceEntry, DocumentPeriod, DocumentStatus, TimeRecordDocument, TimeRecordDraft,
};
use crate::store::{Repository, Session, StoreError};

#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

pub struct MySqlSession {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlSession { tx }))
    }
}

fn parse_enum<T: FromStr>(table: &'static str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::corrupt(table, format!("unexpected value '{value}'")))
}

/// Duplicate key (MySQL 1062) becomes [`StoreError::Duplicate`].
fn unique_violation_as(e: sqlx::Error, what: &'static str) -> StoreError {
    let duplicate = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
    if duplicate {
        StoreError::Duplicate { what }
    } else {
        StoreError::Database(e)
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    employee_id: u64,
    employment_type: String,
    hourly_rate: Decimal,
    monthly_salary: Option<Decimal>,
    leave_credits: Decimal,
    deduction_scheme: String,
    salary_grade: Option<String>,
}

#[derive(sqlx::FromRow)]
struct DtrRow {
    id: u64,
    employee_id: u64,
    employee_name: String,
    month: String,
    year: i32,
    shift_window_description: String,
    approver_name: String,
    approver_title: String,
    total_time: String,
    status: String,
}

#[derive(sqlx::FromRow)]
struct DayRow {
    day: u8,
    am_arrival: Option<NaiveTime>,
    am_departure: Option<NaiveTime>,
    pm_arrival: Option<NaiveTime>,
    pm_departure: Option<NaiveTime>,
    undertime_hours: u32,
    undertime_minutes: u32,
}

impl From<DayRow> for DailyAttendanceEntry {
    fn from(r: DayRow) -> Self {
        DailyAttendanceEntry {
            day: r.day,
            am_arrival: r.am_arrival,
            am_departure: r.am_departure,
            pm_arrival: r.pm_arrival,
            pm_departure: r.pm_departure,
            undertime_hours: r.undertime_hours,
            undertime_minutes: r.undertime_minutes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LoanRow {
    id: u64,
    employee_id: u64,
    loan_name: String,
    principal_amount: Decimal,
    duration_months: u32,
    start_month: u32,
    start_year: i32,
    balance: Decimal,
}

impl From<LoanRow> for Loan {
    fn from(r: LoanRow) -> Self {
        Loan {
            id: r.id,
            employee_id: r.employee_id,
            name: r.loan_name,
            principal_amount: r.principal_amount,
            duration_months: r.duration_months,
            start_month: r.start_month,
            start_year: r.start_year,
            balance: r.balance,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BonusRow {
    id: u64,
    employee_id: u64,
    bonus_name: String,
    amount: Decimal,
    frequency: String,
}

#[derive(sqlx::FromRow)]
struct PayslipRow {
    id: u64,
    employee_id: u64,
    dtr_id: u64,
    month: String,
    year: i32,
    employment_type: String,
    total_hours: Decimal,
    late_minutes: i64,
    working_days: u32,
    days_present: u32,
    days_absent: u32,
    leave_used: Decimal,
    absent_deduction: Decimal,
    gross_income: Decimal,
    loan_deduction: Decimal,
    late_deduction: Decimal,
    bonuses_total: Decimal,
    total_deductions: Decimal,
    net_income: Decimal,
    created_at: DateTime<Utc>,
}

const PAYSLIP_COLUMNS: &str = "id, employee_id, dtr_id, month, year, employment_type, \
     total_hours, late_minutes, working_days, days_present, days_absent, leave_used, \
     absent_deduction, gross_income, loan_deduction, late_deduction, bonuses_total, \
     total_deductions, net_income, created_at";

const PROFILE_COLUMNS: &str = "employee_id, employment_type, hourly_rate, monthly_salary, \
     leave_credits, deduction_scheme, salary_grade";

impl MySqlSession {
    async fn read_profile(
        &mut self,
        employee_id: u64,
        for_update: bool,
    ) -> Result<Option<EmployeeProfile>, StoreError> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM employee_profiles WHERE employee_id = ?{}",
            if for_update { " FOR UPDATE" } else { "" }
        );
        let Some(row) = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&mut *self.tx)
            .await?
        else {
            return Ok(None);
        };

        let fixed: Vec<(String, Decimal)> = sqlx::query_as(
            "SELECT label, amount FROM profile_fixed_deductions WHERE employee_id = ?",
        )
        .bind(employee_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(Some(EmployeeProfile {
            employee_id: row.employee_id,
            employment_type: parse_enum("employee_profiles", &row.employment_type)?,
            hourly_rate: row.hourly_rate,
            monthly_salary: row.monthly_salary,
            leave_credits: row.leave_credits,
            deduction_scheme: row.deduction_scheme,
            fixed_deductions: fixed.into_iter().collect(),
            salary_grade: row.salary_grade,
        }))
    }

    async fn payslip_from_row(&mut self, row: PayslipRow) -> Result<Payslip, StoreError> {
        let statutory: Vec<(String, Decimal)> = sqlx::query_as(
            "SELECT label, amount FROM payslip_deductions WHERE payslip_id = ? ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&mut *self.tx)
        .await?;

        let loans: Vec<(u64, String, Decimal, Decimal)> = sqlx::query_as(
            "SELECT loan_id, loan_name, amount, remaining_balance \
             FROM payslip_loan_deductions WHERE payslip_id = ? ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&mut *self.tx)
        .await?;

        let bonuses: Vec<(String, Decimal)> = sqlx::query_as(
            "SELECT bonus_name, amount FROM payslip_bonuses WHERE payslip_id = ? ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&mut *self.tx)
        .await?;

        let employment_type: EmploymentType = parse_enum("payslips", &row.employment_type)?;

        Ok(Payslip {
            id: row.id,
            employee_id: row.employee_id,
            document_id: row.dtr_id,
            month: row.month,
            year: row.year,
            employment_type,
            total_hours: row.total_hours,
            late_minutes: row.late_minutes,
            working_days: row.working_days,
            days_present: row.days_present,
            days_absent: row.days_absent,
            leave_used: row.leave_used,
            absent_deduction: row.absent_deduction,
            gross_income: row.gross_income,
            statutory: statutory
                .into_iter()
                .map(|(label, amount)| DeductionLine { label, amount })
                .collect(),
            loans: loans
                .into_iter()
                .map(|(loan_id, name, amount, remaining_balance)| LoanDeductionLine {
                    loan_id,
                    name,
                    amount,
                    remaining_balance,
                })
                .collect(),
            loan_deduction: row.loan_deduction,
            late_deduction: row.late_deduction,
            bonuses: bonuses
                .into_iter()
                .map(|(name, amount)| BonusLine { name, amount })
                .collect(),
            bonuses_total: row.bonuses_total,
            total_deductions: row.total_deductions,
            net_income: row.net_income,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl Session for MySqlSession {
    async fn employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>("SELECT id, full_name FROM employees WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(employee)
    }

    async fn insert_employee(&mut self, full_name: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("INSERT INTO employees (full_name) VALUES (?)")
            .bind(full_name)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.last_insert_id())
    }

    async fn profile(&mut self, employee_id: u64) -> Result<Option<EmployeeProfile>, StoreError> {
        self.read_profile(employee_id, false).await
    }

    async fn lock_profile(
        &mut self,
        employee_id: u64,
    ) -> Result<Option<EmployeeProfile>, StoreError> {
        self.read_profile(employee_id, true).await
    }

    async fn save_profile(&mut self, profile: &EmployeeProfile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO employee_profiles
                (employee_id, employment_type, hourly_rate, monthly_salary,
                 leave_credits, deduction_scheme, salary_grade)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                employment_type = VALUES(employment_type),
                hourly_rate = VALUES(hourly_rate),
                monthly_salary = VALUES(monthly_salary),
                leave_credits = VALUES(leave_credits),
                deduction_scheme = VALUES(deduction_scheme),
                salary_grade = VALUES(salary_grade)
            "#,
        )
        .bind(profile.employee_id)
        .bind(profile.employment_type.as_ref())
        .bind(profile.hourly_rate)
        .bind(profile.monthly_salary)
        .bind(profile.leave_credits)
        .bind(&profile.deduction_scheme)
        .bind(&profile.salary_grade)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("DELETE FROM profile_fixed_deductions WHERE employee_id = ?")
            .bind(profile.employee_id)
            .execute(&mut *self.tx)
            .await?;

        for (label, amount) in &profile.fixed_deductions {
            sqlx::query(
                "INSERT INTO profile_fixed_deductions (employee_id, label, amount) VALUES (?, ?, ?)",
            )
            .bind(profile.employee_id)
            .bind(label)
            .bind(amount)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn find_document(
        &mut self,
        employee_id: u64,
        month: &str,
        year: i32,
    ) -> Result<Option<TimeRecordDocument>, StoreError> {
        let Some(row) = sqlx::query_as::<_, DtrRow>(
            r#"
            SELECT id, employee_id, employee_name, month, year, shift_window_description,
                   approver_name, approver_title, total_time, status
            FROM dtrs
            WHERE employee_id = ? AND month = ? AND year = ?
            "#,
        )
        .bind(employee_id)
        .bind(month.trim())
        .bind(year)
        .fetch_optional(&mut *self.tx)
        .await?
        else {
            return Ok(None);
        };

        let entries = sqlx::query_as::<_, DayRow>(
            r#"
            SELECT day, am_arrival, am_departure, pm_arrival, pm_departure,
                   undertime_hours, undertime_minutes
            FROM dtr_days
            WHERE dtr_id = ?
            ORDER BY day
            "#,
        )
        .bind(row.id)
        .fetch_all(&mut *self.tx)
        .await?
        .into_iter()
        .map(DailyAttendanceEntry::from)
        .collect();

        Ok(Some(TimeRecordDocument {
            id: row.id,
            employee_id: row.employee_id,
            status: parse_enum::<DocumentStatus>("dtrs", &row.status)?,
            record: TimeRecordDraft {
                employee_name: row.employee_name,
                month: row.month,
                year: row.year,
                shift_window_description: row.shift_window_description,
                approver_name: row.approver_name,
                approver_title: row.approver_title,
                total_time: row.total_time,
                entries,
            },
        }))
    }

    async fn insert_document(
        &mut self,
        employee_id: u64,
        draft: &TimeRecordDraft,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO dtrs
                (employee_id, employee_name, month, year, shift_window_description,
                 approver_name, approver_title, total_time, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(&draft.employee_name)
        .bind(&draft.month)
        .bind(draft.year)
        .bind(&draft.shift_window_description)
        .bind(&draft.approver_name)
        .bind(&draft.approver_title)
        .bind(&draft.total_time)
        .bind(DocumentStatus::Pending.as_ref())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_violation_as(e, "time record"))?;
        let dtr_id = result.last_insert_id();

        for entry in &draft.entries {
            sqlx::query(
                r#"
                INSERT INTO dtr_days
                    (dtr_id, day, am_arrival, am_departure, pm_arrival, pm_departure,
                     undertime_hours, undertime_minutes)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(dtr_id)
            .bind(entry.day)
            .bind(entry.am_arrival)
            .bind(entry.am_departure)
            .bind(entry.pm_arrival)
            .bind(entry.pm_departure)
            .bind(entry.undertime_hours)
            .bind(entry.undertime_minutes)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(dtr_id)
    }

    async fn delete_document(&mut self, document_id: u64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM dtr_days WHERE dtr_id = ?")
            .bind(document_id)
            .execute(&mut *self.tx)
            .await?;
        sqlx::query("DELETE FROM dtrs WHERE id = ?")
            .bind(document_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn document_periods(
        &mut self,
        employee_id: u64,
    ) -> Result<Vec<DocumentPeriod>, StoreError> {
        let rows: Vec<(u64, String, i32, String)> = sqlx::query_as(
            "SELECT id, month, year, status FROM dtrs WHERE employee_id = ? ORDER BY id",
        )
        .bind(employee_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|(document_id, month, year, status)| {
                Ok(DocumentPeriod {
                    document_id,
                    month,
                    year,
                    status: parse_enum("dtrs", &status)?,
                })
            })
            .collect()
    }

    async fn mark_processed(&mut self, document_id: u64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE dtrs SET status = ? WHERE id = ?")
            .bind(DocumentStatus::Processed.as_ref())
            .bind(document_id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                what: "time record",
                id: document_id,
            });
        }
        Ok(())
    }

    async fn loans(&mut self, employee_id: u64) -> Result<Vec<Loan>, StoreError> {
        let rows = sqlx::query_as::<_, LoanRow>(
            r#"
            SELECT id, employee_id, loan_name, principal_amount, duration_months,
                   start_month, start_year, balance
            FROM employee_loans
            WHERE employee_id = ?
            ORDER BY id
            "#,
        )
        .bind(employee_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Loan::from).collect())
    }

    async fn insert_loan(&mut self, loan: &Loan) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO employee_loans
                (employee_id, loan_name, principal_amount, duration_months,
                 start_month, start_year, balance)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(loan.employee_id)
        .bind(&loan.name)
        .bind(loan.principal_amount)
        .bind(loan.duration_months)
        .bind(loan.start_month)
        .bind(loan.start_year)
        .bind(loan.balance)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn update_loan_balance(
        &mut self,
        loan_id: u64,
        balance: Decimal,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE employee_loans SET balance = ? WHERE id = ?")
            .bind(balance)
            .bind(loan_id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            // An unchanged balance also reports zero rows.
            let exists: Option<(u64,)> = sqlx::query_as("SELECT id FROM employee_loans WHERE id = ?")
                .bind(loan_id)
                .fetch_optional(&mut *self.tx)
                .await?;
            if exists.is_none() {
                return Err(StoreError::Missing {
                    what: "loan",
                    id: loan_id,
                });
            }
        }
        Ok(())
    }

    async fn bonuses(&mut self, employee_id: u64) -> Result<Vec<Bonus>, StoreError> {
        let rows = sqlx::query_as::<_, BonusRow>(
            "SELECT id, employee_id, bonus_name, amount, frequency \
             FROM employee_bonuses WHERE employee_id = ? ORDER BY id",
        )
        .bind(employee_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(Bonus {
                    id: r.id,
                    employee_id: r.employee_id,
                    name: r.bonus_name,
                    amount: r.amount,
                    frequency: parse_enum::<BonusFrequency>("employee_bonuses", &r.frequency)?,
                })
            })
            .collect()
    }

    async fn insert_bonus(&mut self, bonus: &Bonus) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO employee_bonuses (employee_id, bonus_name, amount, frequency) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(bonus.employee_id)
        .bind(&bonus.name)
        .bind(bonus.amount)
        .bind(bonus.frequency.as_ref())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn insert_payslip(&mut self, payslip: &Payslip) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payslips
                (employee_id, dtr_id, month, year, employment_type, total_hours, late_minutes,
                 working_days, days_present, days_absent, leave_used, absent_deduction,
                 gross_income, loan_deduction, late_deduction, bonuses_total,
                 total_deductions, net_income, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payslip.employee_id)
        .bind(payslip.document_id)
        .bind(&payslip.month)
        .bind(payslip.year)
        .bind(payslip.employment_type.as_ref())
        .bind(payslip.total_hours)
        .bind(payslip.late_minutes)
        .bind(payslip.working_days)
        .bind(payslip.days_present)
        .bind(payslip.days_absent)
        .bind(payslip.leave_used)
        .bind(payslip.absent_deduction)
        .bind(payslip.gross_income)
        .bind(payslip.loan_deduction)
        .bind(payslip.late_deduction)
        .bind(payslip.bonuses_total)
        .bind(payslip.total_deductions)
        .bind(payslip.net_income)
        .bind(payslip.created_at)
        .execute(&mut *self.tx)
        .await?;
        let payslip_id = result.last_insert_id();

        for line in &payslip.statutory {
            sqlx::query("INSERT INTO payslip_deductions (payslip_id, label, amount) VALUES (?, ?, ?)")
                .bind(payslip_id)
                .bind(&line.label)
                .bind(line.amount)
                .execute(&mut *self.tx)
                .await?;
        }

        for line in &payslip.loans {
            sqlx::query(
                "INSERT INTO payslip_loan_deductions \
                 (payslip_id, loan_id, loan_name, amount, remaining_balance) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(payslip_id)
            .bind(line.loan_id)
            .bind(&line.name)
            .bind(line.amount)
            .bind(line.remaining_balance)
            .execute(&mut *self.tx)
            .await?;
        }

        for line in &payslip.bonuses {
            sqlx::query("INSERT INTO payslip_bonuses (payslip_id, bonus_name, amount) VALUES (?, ?, ?)")
                .bind(payslip_id)
                .bind(&line.name)
                .bind(line.amount)
                .execute(&mut *self.tx)
                .await?;
        }

        Ok(payslip_id)
    }

    async fn latest_payslip(
        &mut self,
        employee_id: u64,
        period: Option<(&str, i32)>,
    ) -> Result<Option<Payslip>, StoreError> {
        let row = match period {
            Some((month, year)) => {
                let sql = format!(
                    "SELECT {PAYSLIP_COLUMNS} FROM payslips \
                     WHERE employee_id = ? AND month = ? AND year = ? \
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                );
                sqlx::query_as::<_, PayslipRow>(&sql)
                    .bind(employee_id)
                    .bind(month.trim())
                    .bind(year)
                    .fetch_optional(&mut *self.tx)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {PAYSLIP_COLUMNS} FROM payslips WHERE employee_id = ? \
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                );
                sqlx::query_as::<_, PayslipRow>(&sql)
                    .bind(employee_id)
                    .fetch_optional(&mut *self.tx)
                    .await?
            }
        };

        match row {
            Some(row) => Ok(Some(self.payslip_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
