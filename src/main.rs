use chrono::{Datelike, NaiveDate};

use droidplan::assist::BreakdownClient;
use droidplan::config::DroidPlanConfig;
use droidplan::core::calendar::{agenda_for_day, first_of_month, month_grid, sort_by_start};
use droidplan::core::expense::{
    group_expenses_by_month, month_total, sorted_months, Expense, ExpenseCategory,
};
use droidplan::core::stats::stats;
use droidplan::core::suggestion::{accept_suggestion, Breakdown};
use droidplan::core::task::Task;
use droidplan::core::validate::TaskForm;
use droidplan::store::{ExpenseBook, JsonStore, TaskBook};

const USAGE: &str = "\
usage: droidplan [command]

  today                              tasks overlapping today (default)
  day YYYY-MM-DD                     tasks overlapping a day
  list                               all tasks by start time
  month [YYYY-MM]                    calendar grid
  stats                              completion summary
  add CONTENT START END DEADLINE     create a task (YYYY-MM-DDTHH:MM)
  toggle ID                          flip a task's completion
  delete ID                          remove a task
  expenses                           expenses grouped by month
  spend AMOUNT CATEGORY DATE [NOTE]  record an expense
  limit AMOUNT                       set the monthly limit
  breakdown GOAL...                  AI task breakdown, accepted into today's form
  key API_KEY                        save the Gemini API key to the keyring";

fn init_logging() {
    // Wrapper filters: droidplan targets at info/debug (per config), everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("droidplan") {
                let max = if droidplan::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    // No journal (e.g. outside systemd) means no logging, not a failed run.
    let Ok(journal) = systemd_journal_logger::JournalLog::new() else {
        return;
    };
    let journal = journal.with_syslog_identifier("droidplan".to_string());
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logger first so config load warnings reach the journal.
    init_logging();
    let config = DroidPlanConfig::load(&DroidPlanConfig::default_path());
    droidplan::set_debug_logging(config.debug_logging);
    config.ensure_data_dir()?;

    let store = JsonStore::new(&config.data_directory);
    let today = chrono::Local::now().date_naive();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("today");
    let rest = args.get(1..).unwrap_or_default();

    match command {
        "today" => {
            let book = TaskBook::open(store)?;
            print_agenda(&agenda_for_day(book.tasks(), today), today);
        }
        "day" => {
            let day = parse_date(rest.first())?;
            let book = TaskBook::open(store)?;
            print_agenda(&agenda_for_day(book.tasks(), day), day);
        }
        "list" => {
            let book = TaskBook::open(store)?;
            let mut tasks = book.tasks().to_vec();
            sort_by_start(&mut tasks);
            let now = chrono::Local::now().naive_local();
            for task in &tasks {
                print_task(task, now);
            }
        }
        "month" => {
            let month = match rest.first() {
                Some(s) => NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
                    .map_err(|e| format!("bad month {:?}: {}", s, e))?,
                None => first_of_month(today),
            };
            let book = TaskBook::open(store)?;
            print_month(month, today, book.tasks());
        }
        "stats" => {
            let book = TaskBook::open(store)?;
            let s = stats(book.tasks());
            if s.total() == 0 {
                println!("NO DATA AVAILABLE");
            } else {
                println!(
                    "COMPLETE {}  PENDING {}  EFFICIENCY {}%",
                    s.completed,
                    s.pending,
                    s.completion_percent()
                );
            }
        }
        "add" => {
            let [content, start, end, deadline] = rest else {
                return Err(USAGE.into());
            };
            let form = TaskForm {
                content: content.clone(),
                execution_start: start.clone(),
                execution_end: end.clone(),
                deadline: deadline.clone(),
            };
            let mut book = TaskBook::open(store)?;
            let id = book.add(&form)?;
            println!("added {}", id);
        }
        "toggle" | "delete" => {
            let id = rest
                .first()
                .ok_or(USAGE)?
                .parse::<uuid::Uuid>()
                .map_err(|e| format!("bad id: {}", e))?;
            let mut book = TaskBook::open(store)?;
            if command == "toggle" {
                book.toggle(id)?;
            } else {
                book.delete(id)?;
            }
        }
        "expenses" => {
            let book = ExpenseBook::open(store, config.default_monthly_limit)?;
            print_expenses(&book);
        }
        "spend" => {
            let (amount, category, date) = match rest {
                [amount, category, date, ..] => (amount, category, date),
                _ => return Err(USAGE.into()),
            };
            let amount: f64 = amount.parse().map_err(|e| format!("bad amount: {}", e))?;
            let category = ExpenseCategory::from_keyword(category)
                .ok_or_else(|| format!("unknown category {:?}", category))?;
            let date = parse_date(Some(date))?;
            let note = rest.get(3..).unwrap_or_default().join(" ");
            let mut book = ExpenseBook::open(store, config.default_monthly_limit)?;
            book.add(Expense::new(amount, category, date, note)?)?;
        }
        "limit" => {
            let limit: f64 = rest
                .first()
                .ok_or(USAGE)?
                .parse()
                .map_err(|e| format!("bad limit: {}", e))?;
            let mut book = ExpenseBook::open(store, config.default_monthly_limit)?;
            book.set_monthly_limit(limit)?;
        }
        "breakdown" => {
            let goal = rest.join(" ");
            let client = BreakdownClient::from_config(&config).await;
            match client.suggest(&goal).await {
                Breakdown::Unavailable => println!("AI breakdown disabled: no API key configured"),
                Breakdown::Suggestions(list) if list.is_empty() => println!("no suggestions"),
                Breakdown::Suggestions(list) => {
                    let form = TaskForm::blank_at(chrono::Local::now().naive_local());
                    let mut book = TaskBook::open(store)?;
                    for suggestion in &list {
                        match accept_suggestion(&form, suggestion) {
                            Ok(task) => {
                                println!("+ {} ({})", task.content, task.window_label());
                                book.insert(task)?;
                            }
                            Err(e) => println!("- {}: {}", suggestion.content, e),
                        }
                    }
                }
            }
        }
        "key" => {
            let key = rest.first().ok_or(USAGE)?;
            droidplan::assist::keyring::store_api_key(key).await?;
            println!("API key saved to keyring");
        }
        _ => {
            println!("{}", USAGE);
        }
    }

    Ok(())
}

fn parse_date(arg: Option<&String>) -> Result<NaiveDate, String> {
    let s = arg.ok_or_else(|| USAGE.to_string())?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("bad date {:?}: {}", s, e))
}

fn print_task(task: &Task, now: chrono::NaiveDateTime) {
    let status = if task.is_completed {
        "COMPLETE"
    } else if task.is_overdue(now) {
        "CRITICAL"
    } else {
        "ACTIVE"
    };
    println!(
        "[{}] {}  {}  due {}  {}",
        status,
        task.content,
        task.window_label(),
        task.deadline.format("%m/%d %H:%M"),
        task.id
    );
    for sub in &task.subtasks {
        println!("    [{}] {}", if sub.is_completed { "x" } else { " " }, sub.content);
    }
}

fn print_agenda(tasks: &[Task], day: NaiveDate) {
    println!("{}", day.format("%A, %b %e"));
    if tasks.is_empty() {
        println!("  nothing scheduled");
        return;
    }
    let now = chrono::Local::now().naive_local();
    for task in tasks {
        print_task(task, now);
    }
}

fn print_month(month: NaiveDate, today: NaiveDate, tasks: &[Task]) {
    println!("{}", month.format("%B %Y"));
    println!(" Su  Mo  Tu  We  Th  Fr  Sa");
    for week in month_grid(month, today, Some(today)).chunks(7) {
        let line: Vec<String> = week
            .iter()
            .map(|cell| {
                if !cell.in_month {
                    return "  . ".to_string();
                }
                let markers = cell.markers(tasks);
                let mark = if markers.has_completed {
                    '+'
                } else if markers.has_tasks {
                    '*'
                } else if cell.is_today {
                    '<'
                } else {
                    ' '
                };
                format!("{:>3}{}", cell.date.day(), mark)
            })
            .collect();
        println!("{}", line.join(""));
    }
}

fn print_expenses(book: &ExpenseBook) {
    let usage = book.usage();
    println!(
        "LIMIT {:.2}  USED {}%{}",
        book.monthly_limit(),
        usage.rounded_percent(),
        if usage.over_limit { "  OVER" } else { "" }
    );
    let groups = group_expenses_by_month(book.expenses());
    if groups.is_empty() {
        println!("NO FINANCIAL RECORDS LOGGED");
        return;
    }
    for month in sorted_months(&groups) {
        println!("{}  total {:.2}", month, month_total(&groups, month));
        for e in &groups[month] {
            println!(
                "  {}  {:<13} {:>10.2}  {}{}",
                e.date.format("%m/%d"),
                e.category.as_keyword(),
                e.amount,
                e.note,
                if e.is_confirmed { "  [locked]" } else { "" }
            );
        }
    }
}
